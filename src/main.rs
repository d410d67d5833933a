fn main() {
    #[cfg(feature = "cli")]
    oxiqoi::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("oxiqoi: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
