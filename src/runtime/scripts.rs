use std::sync::LazyLock;

use redis::Script;

pub const PLAN_APPLY_SCRIPT_BODY: &str = include_str!("../../lua/plan_apply.lua");

pub static PLAN_APPLY_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(PLAN_APPLY_SCRIPT_BODY));
