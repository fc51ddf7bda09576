mod foods;
mod helpers;
mod learn;
mod plan;
mod profile;
mod progress;
mod shell;
mod suggest;
mod tracker;

pub(crate) use foods::{cmd_analyze, cmd_foods};
pub(crate) use learn::cmd_learn;
pub(crate) use profile::cmd_profile;
pub(crate) use shell::cmd_shell;
pub(crate) use suggest::{cmd_recommend, cmd_suggest, seeded_rng};
