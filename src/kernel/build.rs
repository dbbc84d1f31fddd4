//! Records the build date and time for the boot banner.
//!
//! Honors `SOURCE_DATE_EPOCH` for reproducible builds.

use std::env;
use std::error::Error;
use time::macros::format_description;
use time::OffsetDateTime;

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-env-changed=PROBEOS_CMDLINE");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");

    let built = env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok())
        .unwrap_or_else(OffsetDateTime::now_utc);

    let date = built.format(format_description!(
        "[month repr:short] [day padding:space] [year]"
    ))?;
    let time = built.format(format_description!("[hour]:[minute]:[second]"))?;

    println!("cargo:rustc-env=PROBEOS_BUILD_DATE={}", date);
    println!("cargo:rustc-env=PROBEOS_BUILD_TIME={}", time);
    Ok(())
}
