mod engine;
mod model;
mod piano;
mod player;
mod store;
mod terminal;
mod util;

#[cfg(test)]
mod testing;

pub use engine::render::*;
pub use engine::*;
pub use model::config::*;
pub use model::duration::*;
pub use model::mappings::*;
pub use model::pitch::*;
pub use model::tune::*;
pub use piano::*;
pub use player::*;
pub use store::*;
pub use terminal::*;
pub use util::*;
