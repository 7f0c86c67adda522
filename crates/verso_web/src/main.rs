// Trunk entrypoint. Mounts the app on wasm32 with `--features web`; on native
// targets there is nothing to run.

fn main() {}

#[cfg(all(feature = "web", target_arch = "wasm32"))]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn wasm_start() {
    verso_web::start();
}
