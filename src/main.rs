fn main() {
    nova::cli::main();
}
