use cointoss_frame::{MAX_SEGMENT_LEN, MIN_FRAME_SIZE};
use cointoss_transport::IMAGE_PATH;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("cointoss {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: cointoss");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("COINTOSS_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("features: async={}, cli=true", cfg!(feature = "async"));
    println!(
        "wire: u32be-length segments heads,tails,name (min {MIN_FRAME_SIZE} bytes, segment max {MAX_SEGMENT_LEN})"
    );
    println!("channel_path: {IMAGE_PATH}");

    Ok(SUCCESS)
}
