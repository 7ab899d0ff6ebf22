//! Reads and prints the content of a class file to STDOUT.
extern crate classfile;

use std::env;
use std::fs::File;
use std::io::Read;

use classfile::Classfile;

fn main() {
    let file_path = env::args().nth(1).expect("no file path provided");

    let mut file = File::open(file_path).expect("could not open file");
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).expect("could not read file");

    let model = Classfile::new().parse(buf);

    println!(
        "{} extends {}",
        model.name().expect("could not read class name"),
        model
            .super_name()
            .expect("could not read super class name")
            .unwrap_or("nothing")
    );

    println!("access flags: {:?}", model.access_flags().unwrap());

    println!("fields:");
    for field in model.fields().expect("could not read fields") {
        println!(
            "    {} {}",
            field.descriptor_raw().unwrap(),
            field.name().unwrap()
        );
    }

    println!("methods:");
    for method in model.methods().expect("could not read methods") {
        println!(
            "    {}{}",
            method.name().unwrap(),
            method.descriptor_raw().unwrap()
        );
        if let Some(code) = method.code() {
            println!(
                "        max_stack={} max_locals={} instructions={}",
                code.max_stack(),
                code.max_locals(),
                code.instructions().len()
            );
        }
    }
}
