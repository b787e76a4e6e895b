use std::path::PathBuf;

use serde::Serialize;

use crate::cmd::send::load_coin;
use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{emit, human_size, print_raw, OutputFormat, Report};

#[derive(Serialize)]
struct EncodeReport {
    output: PathBuf,
    name: String,
    frame_size: usize,
}

impl Report for EncodeReport {
    const SCHEMA: &'static str = "frame-encoded.schema.json";

    fn header(&self) -> Vec<&'static str> {
        vec!["OUTPUT", "NAME", "FRAME"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        vec![vec![
            self.output.display().to_string(),
            self.name.clone(),
            human_size(self.frame_size),
        ]]
    }

    fn pretty(&self) -> String {
        format!(
            "wrote {:?} to {} ({} bytes)",
            self.name,
            self.output.display(),
            self.frame_size
        )
    }

    fn raw(&self) -> Vec<u8> {
        format!("{}\n", self.output.display()).into_bytes()
    }
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let transfer = load_coin(&args.coin)?;
    let frame = transfer
        .encode()
        .map_err(|err| frame_error("encode failed", err))?;

    if args.output.as_os_str() == "-" {
        print_raw(&frame);
        return Ok(SUCCESS);
    }

    std::fs::write(&args.output, &frame).map_err(|err| {
        io_error(&format!("cannot write {}", args.output.display()), err)
    })?;

    emit(
        &EncodeReport {
            output: args.output,
            name: transfer.name,
            frame_size: frame.len(),
        },
        format,
    );
    Ok(SUCCESS)
}
