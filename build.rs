use std::env;
use std::path::PathBuf;

const WATCHED_VARIABLES: [&str; 4] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"];

fn warn(message: impl AsRef<str>) {
    println!("cargo:warning=stillshot: {}", message.as_ref());
}

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    // Linux and macOS find FFmpeg through pkg-config without help.
    if env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() != "windows"
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        warn("FFMPEG_DIR is not set. Install FFmpeg with vcpkg and set VCPKG_ROOT or FFMPEG_DIR.");
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let install_dir = PathBuf::from(vcpkg_root).join("installed").join(triplet);

    if !install_dir.exists() {
        warn(format!("no vcpkg FFmpeg install found at {}", install_dir.display()));
        return;
    }

    warn(format!(
        "using vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to skip discovery",
        install_dir.display()
    ));
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        warn("set VCPKGRS_DYNAMIC=1 if your vcpkg FFmpeg is a dynamic build");
    }
}
