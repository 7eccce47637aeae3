//! Sandboxed Lua state construction.
//!
//! Every script unit runs in its own [`mlua::Lua`] state with the
//! ambient-authority parts of the standard library stripped out. Scripts
//! keep the pure libraries (`string`, `table`, `math`) plus a reduced `os`
//! table limited to clock queries. Everything that touches the filesystem,
//! spawns processes, or loads code at runtime is removed.

use mlua::{Function, Lua, Table, Value as LuaValue};

/// Globals removed outright from every guest state.
const BLOCKED_GLOBALS: &[&str] = &[
    "io",
    "require",
    "package",
    "dofile",
    "loadfile",
    "load",
    "loadstring",
    "collectgarbage",
];

/// The only `os` entries guests may keep.
const ALLOWED_OS_FNS: &[&str] = &["time", "clock", "date", "difftime"];

/// Create a fresh Lua state with the sandbox policy applied.
pub fn sandboxed_lua() -> mlua::Result<Lua> {
    let lua = Lua::new();
    apply_policy(&lua)?;
    Ok(lua)
}

fn apply_policy(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();

    for name in BLOCKED_GLOBALS {
        globals.set(*name, LuaValue::Nil)?;
    }

    // Replace `os` with a table carrying only clock queries, so
    // os.execute / os.remove / os.getenv are gone as well.
    if let Ok(os) = globals.get::<Table>("os") {
        let safe_os = lua.create_table()?;
        for name in ALLOWED_OS_FNS {
            if let Ok(f) = os.get::<Function>(*name) {
                safe_os.set(*name, f)?;
            }
        }
        globals.set("os", safe_os)?;
    }

    Ok(())
}
