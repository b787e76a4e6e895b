use std::path::{Path, PathBuf};

use cointoss_frame::{decode_transfer_prefix, CoinTransfer};
use cointoss_store::ImageFormat;
use serde::Serialize;

use crate::cmd::{label_policy, read_file, InspectArgs};
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{emit, human_size, OutputFormat, Report};

#[derive(Serialize)]
struct InspectReport {
    file: PathBuf,
    frame_size: usize,
    trailing_bytes: usize,
    name: String,
    heads: FaceReport,
    tails: FaceReport,
}

#[derive(Serialize)]
struct FaceReport {
    size: usize,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    extracted: Option<PathBuf>,
}

impl FaceReport {
    fn new(bytes: &[u8]) -> Self {
        Self {
            size: bytes.len(),
            format: ImageFormat::sniff(bytes).extension(),
            extracted: None,
        }
    }
}

impl Report for InspectReport {
    const SCHEMA: &'static str = "frame-inspect.schema.json";

    fn header(&self) -> Vec<&'static str> {
        vec!["SEGMENT", "SIZE", "DETAIL"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let face = |label: &str, face: &FaceReport| {
            let detail = match &face.extracted {
                Some(path) => format!("{} -> {}", face.format, path.display()),
                None => face.format.to_string(),
            };
            vec![label.to_string(), human_size(face.size), detail]
        };
        vec![
            face("heads", &self.heads),
            face("tails", &self.tails),
            vec![
                "name".to_string(),
                human_size(self.name.len()),
                self.name.clone(),
            ],
        ]
    }

    fn pretty(&self) -> String {
        format!(
            "{}: {:?} heads={} ({}) tails={} ({}) frame={} trailing={}",
            self.file.display(),
            self.name,
            self.heads.size,
            self.heads.format,
            self.tails.size,
            self.tails.format,
            self.frame_size,
            self.trailing_bytes
        )
    }

    fn raw(&self) -> Vec<u8> {
        format!("{}\n", self.name).into_bytes()
    }
}

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let frame = read_file(&args.file)?;
    let (transfer, consumed) = decode_transfer_prefix(&frame, label_policy(args.lossy_names))
        .map_err(|err| frame_error(&format!("cannot decode {}", args.file.display()), err))?;

    let mut heads = FaceReport::new(&transfer.heads);
    let mut tails = FaceReport::new(&transfer.tails);

    if let Some(dir) = &args.extract {
        let (heads_path, tails_path) = extract(&transfer, dir)?;
        heads.extracted = Some(heads_path);
        tails.extracted = Some(tails_path);
    }

    emit(
        &InspectReport {
            trailing_bytes: frame.len() - consumed,
            frame_size: frame.len(),
            file: args.file,
            name: transfer.name,
            heads,
            tails,
        },
        format,
    );
    Ok(SUCCESS)
}

fn extract(transfer: &CoinTransfer, dir: &Path) -> CliResult<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .map_err(|err| io_error(&format!("cannot create {}", dir.display()), err))?;

    let write = |face: &str, bytes: &[u8]| -> CliResult<PathBuf> {
        let path = dir.join(format!("{face}.{}", ImageFormat::sniff(bytes).extension()));
        std::fs::write(&path, bytes)
            .map_err(|err| io_error(&format!("cannot write {}", path.display()), err))?;
        Ok(path)
    };

    Ok((write("heads", &transfer.heads)?, write("tails", &transfer.tails)?))
}
