mod gacha;
mod misc;
mod player;
mod reveal;

pub use gacha::{gacha_routes, PullBody};
pub use misc::misc_routes;
pub use player::player_routes;
pub use reveal::reveal_routes;
