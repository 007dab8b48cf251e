use std::time::SystemTime;

fn main() {
    let build_id = match SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
        Ok(now) => format!("{:x}-{:x}", now.as_secs(), now.subsec_nanos()),
        Err(_) => "unknown".to_string(),
    };

    // Surfaced in run reports and audit lines so scheduler logs can be tied to a binary.
    println!("cargo:rustc-env=DIARY_BUILD_ID={}", build_id);
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");
}
