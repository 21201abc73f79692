use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("imgshm {}", env!("CARGO_PKG_VERSION"));
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!(
        "target: {}",
        option_env!("IMGSHM_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("os: {}", std::env::consts::OS);
    println!("arch: {}", std::env::consts::ARCH);
    println!(
        "probe tag: {} bytes, single header: {} bytes, dual header: {} bytes",
        imgshm_packet::TAG_SIZE,
        imgshm_packet::SINGLE_HEADER_SIZE,
        imgshm_packet::DUAL_HEADER_SIZE
    );
    println!(
        "max packet: {} bytes",
        imgshm_packet::DEFAULT_MAX_PACKET_SIZE
    );

    Ok(SUCCESS)
}
