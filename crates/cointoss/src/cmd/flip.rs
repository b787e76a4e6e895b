use std::time::Duration;

use cointoss_flip::{face_rotation, CoinSide, Flip, FlipState, FLIP_DURATION};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::cmd::FlipArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{emit, OutputFormat, Report};

#[derive(Serialize)]
struct FlipReport {
    seed: Option<u64>,
    from: CoinSide,
    flips: Vec<FlipRow>,
}

#[derive(Serialize)]
struct FlipRow {
    #[serde(flatten)]
    flip: Flip,
    rotation: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    timeline: Vec<TimelinePoint>,
}

#[derive(Serialize)]
struct TimelinePoint {
    elapsed_ms: u64,
    rotation: f32,
    face_rotation: f32,
    visible: CoinSide,
}

impl FlipRow {
    fn new(flip: Flip, steps: Option<u32>) -> Self {
        Self {
            flip,
            rotation: flip.rotation(),
            timeline: steps.map(|steps| timeline(&flip, steps)).unwrap_or_default(),
        }
    }
}

fn timeline(flip: &Flip, steps: u32) -> Vec<TimelinePoint> {
    let steps = steps.max(1);
    (0..=steps)
        .map(|step| {
            let elapsed = FLIP_DURATION.mul_f64(f64::from(step) / f64::from(steps));
            let rotation = flip.rotation_at_elapsed(elapsed);
            TimelinePoint {
                elapsed_ms: duration_millis(elapsed),
                rotation,
                face_rotation: face_rotation(rotation),
                visible: flip.visible_side(rotation),
            }
        })
        .collect()
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Report for FlipReport {
    const SCHEMA: &'static str = "coin-flip.schema.json";

    fn header(&self) -> Vec<&'static str> {
        vec!["#", "FROM", "HALF TURNS", "ROTATION", "RESULT"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.flips
            .iter()
            .enumerate()
            .map(|(index, row)| {
                vec![
                    (index + 1).to_string(),
                    row.flip.start_side.to_string(),
                    row.flip.half_turns.to_string(),
                    format!("{}°", row.rotation),
                    row.flip.end_side.to_string(),
                ]
            })
            .collect()
    }

    fn pretty(&self) -> String {
        self.flips
            .iter()
            .map(|row| {
                format!(
                    "{} -> {} ({} half turns)",
                    row.flip.start_side, row.flip.end_side, row.flip.half_turns
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn raw(&self) -> Vec<u8> {
        self.flips
            .iter()
            .map(|row| format!("{}\n", row.flip.end_side))
            .collect::<String>()
            .into_bytes()
    }
}

pub fn run(args: FlipArgs, format: OutputFormat) -> CliResult<i32> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut state = FlipState::new(args.from);
    let flips = (0..args.count)
        .map(|_| FlipRow::new(state.flip(&mut rng), args.timeline))
        .collect();

    emit(
        &FlipReport {
            seed: args.seed,
            from: args.from,
            flips,
        },
        format,
    );
    Ok(SUCCESS)
}
