fn main() {
    // Emits PKG_VERSION, GIT_COMMIT_HASH_SHORT, BUILT_TIME_UTC etc. into $OUT_DIR/built.rs
    built::write_built_file().expect("Failed to acquire build-time information");
}
