pub mod animation;
pub mod avatar;
pub mod collision;
pub mod config;
pub mod controller;
pub mod error;
pub mod plugin;
pub mod regimes;
pub mod simulation;
pub mod state;
pub mod tilemap;
pub mod timing;
pub mod transitions;

pub use animation::{AnimationClip, AnimationLibrary};
pub use avatar::Avatar;
pub use config::{load_game_config, GameConfig};
pub use controller::{AvatarController, TickOutcome};
pub use error::{AnimationError, AvatarError, ConfigError};
pub use plugin::{
    AvatarCommandEvent, AvatarPlugin, AvatarStateChanged, ClockModeEvent, TileChangeEvent,
};
pub use state::{AvatarState, Command, CommandAction, Direction, ParentState};
pub use tilemap::{TileChange, TileDef, TileGrid, TileId, TileRegistry};
