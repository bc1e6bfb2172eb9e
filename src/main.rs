#[actix_web::main]
async fn main() -> std::io::Result<()> {
    datagen_lib::run().await
}
