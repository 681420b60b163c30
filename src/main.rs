#[actix_web::main]
async fn main() -> std::io::Result<()> {
    indus_equipment_server::run().await
}
