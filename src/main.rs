#[macro_use]
extern crate rocket;

#[launch]
fn rocket() -> _ {
    bridge_server::rocket()
}
