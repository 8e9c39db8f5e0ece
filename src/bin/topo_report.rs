//! Prints the detected topology: worker slots, packages, and the package
//! each slot maps to. Handy for checking what the stealing policies will
//! see on a given machine.

use worklist::{active_threads, topology};

fn main() {
    let topo = topology();

    println!("worker slots : {}", topo.max_threads());
    println!("packages     : {}", topo.num_packages());
    println!("active       : {}", active_threads());
    println!();

    for package in 0..topo.num_packages() {
        let members: Vec<String> = (0..topo.max_threads())
            .filter(|&w| topo.package_of(w) == package)
            .map(|w| w.to_string())
            .collect();
        println!("package {:>2}  : workers {}", package, members.join(", "));
    }
}
