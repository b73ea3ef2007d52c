#[derive(Debug, PartialEq, Clone, Copy)]
pub enum SlideState {
    AtRest,   // Velocity is (0, 0), position never changes
    Drifting, // Position moves by the velocity on every tick
}
