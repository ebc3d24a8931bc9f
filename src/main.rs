fn main() {
    std::process::exit(geoprobe::app::startup::startup());
}
