//! Basic MegaCouch client example
//!
//! Walks through the document lifecycle against a local CouchDB:
//! create a database, create a document, mutate and save it with
//! revision tracking, then query it back.
//!
//! Run with: cargo run --example basic

use megacouch::{Doc, FindRequest, Server, ServerConfig};
use serde_json::json;

#[tokio::main]
async fn main() -> megacouch::Result<()> {
    tracing_subscriber::fmt().init();

    println!("MegaCouch Basic Example");
    println!("=======================\n");

    let server = Server::new(&ServerConfig {
        scheme: "http".to_string(),
        user: "admin".to_string(),
        password: "secret".to_string(),
        host: "127.0.0.1".to_string(),
        port: 5984,
    })?;

    server.check_connection_or_throw().await?;
    println!("Connected to {}", server.base_url().host_str().unwrap_or("?"));

    let db = server.use_db("orders");
    db.create_if_not_exists().await?;

    let mut doc = Doc::with_id(db.clone(), "o1");
    doc.data.set(json!({"total": 10, "customer": "ada"}))?;
    let created = doc.create().await?;
    println!("Created {} at rev {:?}", created.id, created.rev);

    doc.data.merge(json!({"total": 20}))?;
    if let Some(saved) = doc.save_if_changed().await? {
        println!("Saved {} at rev {:?}", saved.id, saved.rev);
    }

    // A pristine handle saves nothing.
    assert!(doc.save_if_changed().await?.is_none());

    let found = db
        .find_first_or_throw(
            FindRequest::selector(json!({"customer": "ada"})),
            json!({"total": "desc"}),
        )
        .await?;
    println!("Query found: {found}");

    doc.delete().await?;
    println!("Deleted o1");

    Ok(())
}
