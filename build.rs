fn main() -> Result<(), Box<dyn std::error::Error>> {
    let protoc = protoc_bin_vendored::protoc_bin_path()?;
    // Build scripts are single-threaded, nothing else reads the environment concurrently.
    unsafe {
        std::env::set_var("PROTOC", protoc);
    }

    println!("cargo:rerun-if-changed=proto/identity.proto");
    tonic_build::compile_protos("proto/identity.proto")?;
    Ok(())
}
