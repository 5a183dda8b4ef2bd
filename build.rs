fn main() {
    // Only ESP-IDF builds need the sysenv propagated from esp-idf-sys.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
