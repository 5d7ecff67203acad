fn main() -> Result<(), Box<dyn std::error::Error>> {
    built::write_built_file()?;

    println!("cargo:rerun-if-changed=proto");

    // protox parses the proto in-process, so no system protoc is needed
    let file_descriptors = protox::compile(["sso/v1/sso.proto"], ["proto"])?;

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_fds(file_descriptors)?;

    Ok(())
}
