/// Display version information
pub fn execute() {
    println!("trustdao {}", env!("CARGO_PKG_VERSION"));
    println!("Operator CLI for the TrustDAO trusted-node governance engine");
}
