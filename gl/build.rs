use gl_generator::{Registry, Api, Profile, Fallbacks, GlobalGenerator};
use std::env;
use std::fs::File;
use std::path::Path;

fn main() {
	println!("cargo:rerun-if-changed=build.rs");

	let dest = env::var("OUT_DIR").unwrap();
	let mut file = File::create(Path::new(&dest).join("gl_bindings.rs")).unwrap();

	// Direct state access is core from 4.5 onward; nothing else is needed from the registry.
	Registry::new(Api::Gl, (4, 5), Profile::Core, Fallbacks::All, [])
		.write_bindings(GlobalGenerator, &mut file)
		.unwrap();
}
