//! The `game` table exposed to guest code.
//!
//! Queries read from a [`WorldView`] snapshot taken at call time, so a script
//! observes a consistent world no matter what it requests. Mutation functions
//! never touch the world; they append [`MutationRequest`]s to a queue the
//! runtime applies only after the call returns successfully. The return value
//! of a mutation function is only an acknowledgement of enqueueing.

use std::cell::RefCell;
use std::rc::Rc;

use delve_core::{ActorId, MutationRequest, WorldView};
use mlua::{Lua, LuaSerdeExt, Table, Value as LuaValue};
use tracing::debug;

pub type MutationQueue = Rc<RefCell<Vec<MutationRequest>>>;

/// Build the host API table for one guest call.
///
/// Returns the table to pass as the call's `game` argument and the mutation
/// queue the caller drains after the call completes.
pub fn install(lua: &Lua, view: WorldView) -> mlua::Result<(Table, MutationQueue)> {
    let view = Rc::new(view);
    let queue: MutationQueue = Rc::new(RefCell::new(Vec::new()));
    let game = lua.create_table()?;

    // --- read-only queries against the snapshot ---

    let v = Rc::clone(&view);
    game.set(
        "get_actor",
        lua.create_function(move |lua, id: u64| match v.actor(id) {
            Some(actor) => lua.to_value(actor),
            None => Ok(LuaValue::Nil),
        })?,
    )?;

    let v = Rc::clone(&view);
    game.set(
        "actors_at",
        lua.create_function(move |lua, (x, y): (i32, i32)| lua.to_value(&v.actors_at(x, y)))?,
    )?;

    let v = Rc::clone(&view);
    game.set(
        "list_actors",
        lua.create_function(move |lua, ()| lua.to_value(&v.actors))?,
    )?;

    let v = Rc::clone(&view);
    game.set(
        "is_walkable",
        lua.create_function(move |_, (x, y): (i32, i32)| Ok(v.is_walkable(x, y)))?,
    )?;

    let v = Rc::clone(&view);
    game.set("turn", lua.create_function(move |_, ()| Ok(v.turn))?)?;

    // --- mutation requests, applied by the host after the call returns ---

    let q = Rc::clone(&queue);
    game.set(
        "deal_damage",
        lua.create_function(move |_, (target, amount): (u64, i32)| {
            q.borrow_mut().push(MutationRequest::DealDamage {
                target: ActorId::from_raw(target),
                amount,
            });
            Ok(true)
        })?,
    )?;

    let q = Rc::clone(&queue);
    game.set(
        "heal",
        lua.create_function(move |_, (target, amount): (u64, i32)| {
            q.borrow_mut().push(MutationRequest::Heal {
                target: ActorId::from_raw(target),
                amount,
            });
            Ok(true)
        })?,
    )?;

    let q = Rc::clone(&queue);
    game.set(
        "emit_message",
        lua.create_function(move |_, text: String| {
            q.borrow_mut().push(MutationRequest::EmitMessage { text });
            Ok(true)
        })?,
    )?;

    let q = Rc::clone(&queue);
    game.set(
        "spawn_request",
        lua.create_function(move |_, (name, x, y): (String, i32, i32)| {
            q.borrow_mut().push(MutationRequest::SpawnRequest { name, x, y });
            Ok(true)
        })?,
    )?;

    game.set(
        "log",
        lua.create_function(|_, text: String| {
            debug!(target: "delve::script", "{text}");
            Ok(())
        })?,
    )?;

    Ok((game, queue))
}
