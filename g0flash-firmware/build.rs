use std::{
    env,
    ffi::OsStr,
    fs,
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

fn main() {
    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());

    println!("cargo:rerun-if-env-changed=G0FLASH_BOARD");
    println!("cargo:rerun-if-changed=src/boards");

    let board = env::var("G0FLASH_BOARD").unwrap_or_else(|_| "generic".to_string());

    let src = format!("src/boards/{}.x", board.to_lowercase());
    if !Path::new(&src).is_file() {
        panic!("board {board} is unknown");
    }
    println!("cargo:rerun-if-changed={src}");
    let memory = fs::read(&src).unwrap_or_else(|_| panic!("cannot read board memory from {src}"));
    fs::write(out.join("memory.x"), memory).unwrap();

    let mut board_mods = File::create(out.join("board_mods.rs")).unwrap();
    for entry in fs::read_dir("src/boards").unwrap() {
        let entry = entry.unwrap();
        if entry.metadata().unwrap().is_file()
            && entry.path().extension() == Some(OsStr::new("rs"))
            && entry.file_name() != OsStr::new("mod.rs")
        {
            writeln!(&mut board_mods, "#[path=\"{}\"]", entry.path().canonicalize().unwrap().to_str().unwrap())
                .unwrap();
            writeln!(&mut board_mods, "mod {};", entry.path().file_stem().unwrap().to_str().unwrap()).unwrap();
        }
    }
    writeln!(&mut board_mods, "pub use {board}::BoardImpl as Chosen;").unwrap();

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rustc-link-search={}", out.display());
}
