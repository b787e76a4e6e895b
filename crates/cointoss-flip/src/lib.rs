//! Coin flip model.
//!
//! A flip spins the coin a random number of half turns around its vertical
//! axis. An even count lands on the side that was showing, an odd count on
//! the other one. [`FlipState`] carries the showing side from one flip to
//! the next; [`Flip`] describes a single animation.
//!
//! ```
//! use cointoss_flip::{CoinSide, FlipState};
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let mut state = FlipState::new(CoinSide::Heads);
//! let flip = state.flip(&mut rng);
//!
//! assert_eq!(flip.visible_side(flip.rotation()), flip.end_side);
//! assert_eq!(state.current_side(), flip.end_side);
//! ```

pub mod flip;
pub mod side;

pub use flip::{
    face_rotation, is_flipped, Flip, FlipState, FLIP_DURATION, FLIP_SPREAD, FULL_ROTATION,
    HALF_ROTATION, MAX_FLIPS, MIN_FLIPS, QUARTER_ROTATION, THREE_QUARTER_ROTATION,
};
pub use side::{CoinSide, ParseSideError};
