fn main() {
    println!("cargo:rerun-if-changed=proto/appsinstalled.proto");
    prost_build::compile_protos(&["proto/appsinstalled.proto"], &["proto/"])
        .expect("failed to compile appsinstalled.proto");
}
