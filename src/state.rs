use serde::{Deserialize, Serialize};

use crate::collision::Aabb;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    #[default]
    Right,
}

impl Direction {
    pub fn sign(self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Left => "Left",
            Direction::Right => "Right",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParentState {
    Standing,
    Falling,
    Running,
    Jumping,
    Climbing,
}

impl ParentState {
    pub const ALL: [ParentState; 5] = [
        ParentState::Standing,
        ParentState::Falling,
        ParentState::Running,
        ParentState::Jumping,
        ParentState::Climbing,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ParentState::Standing => "Charlie_Standing",
            ParentState::Falling => "Charlie_Falling",
            ParentState::Running => "Charlie_Running",
            ParentState::Jumping => "Charlie_Jumping",
            ParentState::Climbing => "Charlie_Climbing",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.label() == label)
    }
}

impl std::fmt::Display for ParentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

macro_rules! sub_states {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn from_label(label: &str) -> Option<Self> {
                match label {
                    $($label => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

sub_states! {
    /// Idle regime. `Standing_Looking` pans the camera and applies no physics.
    StandingState {
        Standing => "Standing",
        Looking => "Standing_Looking",
    }
}

sub_states! {
    RunningState {
        StandingToRunning => "Standing_To_Running",
        Running => "Running",
        RunningToStanding => "Running_To_Standing",
        MidSpeedImpactRise => "Wall_Impact_Mid_Speed_Rise",
        MidSpeedImpactFall => "Wall_Impact_Mid_Speed_Fall",
        MidSpeedImpactLand => "Wall_Impact_Mid_Speed_Land",
        HighSpeedImpactRise => "Wall_Impact_High_Speed_Rise",
        HighSpeedImpactFall => "Wall_Impact_High_Speed_Fall",
        HighSpeedImpactLand => "Wall_Impact_High_Speed_Land",
    }
}

sub_states! {
    FallingState {
        DownFacing => "Down_Facing_Falling",
        WallImpactLeft => "Wall_Impact_Falling_Left",
        WallImpactRight => "Wall_Impact_Falling_Right",
        ToDeathLeft => "Falling_To_Death_Left",
        ToDeathRight => "Falling_To_Death_Right",
        Dead => "Dead",
    }
}

sub_states! {
    JumpingState {
        VerticalTakeoff => "Vertical_Jump_Takeoff",
        VerticalRise => "Vertical_Jump_Rise",
        VerticalFall => "Vertical_Jump_Fall",
        VerticalLanding => "Vertical_Jump_Landing",
        GapTakeoff => "Gap_Jump_Takeoff",
        GapArcRise => "Gap_Jump_Arc_Rise",
        GapArcFall => "Gap_Jump_Arc_Fall",
        GapLanding => "Gap_Jump_Landing",
        WallTakeoff => "Wall_Jump_Takeoff",
        WallArcRise => "Wall_Jump_Arc_Rise",
        WallArcFall => "Wall_Jump_Arc_Fall",
        WallLanding => "Wall_Jump_Landing",
    }
}

sub_states! {
    ClimbingState {
        GrabAscending => "Ledge_Grab_Ascending",
        GrabDescending => "Ledge_Grab_Descending",
        Grabbing => "Ledge_Grabbing",
        Hanging => "Hanging",
        HangingDrop => "Hanging_Drop",
        ClimbingUp => "Climbing_Up",
        ClimbingToStanding => "Climbing_To_Standing",
    }
}

/// A sub-state tagged with the regime that owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AvatarState {
    Standing(StandingState),
    Falling(FallingState),
    Running(RunningState),
    Jumping(JumpingState),
    Climbing(ClimbingState),
}

impl AvatarState {
    pub fn parent(self) -> ParentState {
        match self {
            AvatarState::Standing(_) => ParentState::Standing,
            AvatarState::Falling(_) => ParentState::Falling,
            AvatarState::Running(_) => ParentState::Running,
            AvatarState::Jumping(_) => ParentState::Jumping,
            AvatarState::Climbing(_) => ParentState::Climbing,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AvatarState::Standing(s) => s.label(),
            AvatarState::Falling(s) => s.label(),
            AvatarState::Running(s) => s.label(),
            AvatarState::Jumping(s) => s.label(),
            AvatarState::Climbing(s) => s.label(),
        }
    }

    pub fn from_labels(parent: &str, state: &str) -> Option<Self> {
        match ParentState::from_label(parent)? {
            ParentState::Standing => StandingState::from_label(state).map(Self::Standing),
            ParentState::Falling => FallingState::from_label(state).map(Self::Falling),
            ParentState::Running => RunningState::from_label(state).map(Self::Running),
            ParentState::Jumping => JumpingState::from_label(state).map(Self::Jumping),
            ParentState::Climbing => ClimbingState::from_label(state).map(Self::Climbing),
        }
    }

    /// Every state of every regime, regime by regime.
    pub fn all() -> impl Iterator<Item = AvatarState> {
        StandingState::ALL
            .iter()
            .copied()
            .map(Self::Standing)
            .chain(FallingState::ALL.iter().copied().map(Self::Falling))
            .chain(RunningState::ALL.iter().copied().map(Self::Running))
            .chain(JumpingState::ALL.iter().copied().map(Self::Jumping))
            .chain(ClimbingState::ALL.iter().copied().map(Self::Climbing))
    }
}

impl std::fmt::Display for AvatarState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.parent(), self.label())
    }
}

impl From<StandingState> for AvatarState {
    fn from(s: StandingState) -> Self {
        AvatarState::Standing(s)
    }
}

impl From<FallingState> for AvatarState {
    fn from(s: FallingState) -> Self {
        AvatarState::Falling(s)
    }
}

impl From<RunningState> for AvatarState {
    fn from(s: RunningState) -> Self {
        AvatarState::Running(s)
    }
}

impl From<JumpingState> for AvatarState {
    fn from(s: JumpingState) -> Self {
        AvatarState::Jumping(s)
    }
}

impl From<ClimbingState> for AvatarState {
    fn from(s: ClimbingState) -> Self {
        AvatarState::Climbing(s)
    }
}

/// Named sub-rectangle of the avatar, relative to the avatar origin.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionBlock {
    pub name: String,
    pub rect: Aabb,
}

pub const BODY_BLOCK: &str = "Avatar";
pub const HAND_BLOCK: &str = "Hand";

#[derive(Clone, Debug, PartialEq)]
pub struct State {
    pub kind: AvatarState,
    pub state_index: u32,
    pub direction: Direction,
    pub collision_blocks: Vec<CollisionBlock>,
}

impl State {
    pub fn new(kind: impl Into<AvatarState>, direction: Direction) -> Self {
        Self {
            kind: kind.into(),
            state_index: 0,
            direction,
            collision_blocks: Vec::new(),
        }
    }

    pub fn parent(&self) -> ParentState {
        self.kind.parent()
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    pub fn block(&self, name: &str) -> Option<&CollisionBlock> {
        self.collision_blocks.iter().find(|b| b.name == name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandAction {
    Running,
    Jumping,
    Looking,
    Down,
}

/// Requested action for the coming tick. Written by the input side once per
/// tick and cleared by the core only when a transition consumes it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Command {
    pub action: Option<CommandAction>,
    pub direction: Option<Direction>,
}

impl Command {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(action: CommandAction, direction: Option<Direction>) -> Self {
        Self {
            action: Some(action),
            direction,
        }
    }

    pub fn running(direction: Direction) -> Self {
        Self::new(CommandAction::Running, Some(direction))
    }

    pub fn jumping(direction: Option<Direction>) -> Self {
        Self::new(CommandAction::Jumping, direction)
    }

    pub fn looking() -> Self {
        Self::new(CommandAction::Looking, None)
    }

    pub fn down() -> Self {
        Self::new(CommandAction::Down, None)
    }

    pub fn is(&self, action: CommandAction) -> bool {
        self.action == Some(action)
    }

    pub fn is_empty(&self) -> bool {
        self.action.is_none()
    }
}
