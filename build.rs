use std::env;
use std::path::PathBuf;

fn main() {
    // The FTDI vendor libraries are only needed by the SPI transport, which
    // is compiled behind the `hardware` feature. A default build must not
    // require them.
    if env::var_os("CARGO_FEATURE_HARDWARE").is_none() {
        return;
    }

    // Get the current directory (project root for this crate)
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let project_root = PathBuf::from(&manifest_dir);

    // Shared FTDI libraries live next to the project root, or wherever
    // FTDI_LIB_DIR points.
    let lib_root = env::var_os("FTDI_LIB_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| project_root.join("ftdi-libs"));

    // Path to MPSSE DLL (Win32/32-bit)
    let mpsse_lib_path = lib_root.join("FTDI MPSSE").join("build").join("Win32").join("DLL");

    // Path to D2XX DLL
    let d2xx_lib_path = lib_root.join("FTDI-D2XX-Drivers-Win-2.12.36.20U").join("x86");

    // Tell cargo where to find the libraries
    println!("cargo:rustc-link-search=native={}", mpsse_lib_path.display());
    println!("cargo:rustc-link-search=native={}", d2xx_lib_path.display());

    // Link against the libraries
    // Note: libmpsse.dll depends on FTD2XX.dll, which will be loaded at runtime
    println!("cargo:rustc-link-lib=dylib=libmpsse");

    // Rerun if the DLL paths change
    println!("cargo:rerun-if-env-changed=FTDI_LIB_DIR");
    println!("cargo:rerun-if-changed=ftdi-libs");
}
