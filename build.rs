fn main() {
    // Directories searched after the shell's working directory when resolving a command.
    println!("cargo:rustc-env=MSH_PATH_FALLBACK=/usr/local/bin:/usr/bin:/bin");
    println!("cargo:rerun-if-changed=build.rs");
}
