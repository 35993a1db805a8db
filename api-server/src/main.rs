#[rocket::launch]
fn rocket() -> _ {
    movie_api::rocket()
}
