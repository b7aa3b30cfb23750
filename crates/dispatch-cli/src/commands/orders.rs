use anyhow::Result;
use dispatch_core::{OrderId, OrderStatus, PacketMode};
use dispatch_storage::Storage;

use crate::cli::OrderCommands;

pub async fn handle(cmd: OrderCommands, storage: &Storage) -> Result<()> {
    match cmd {
        OrderCommands::List => list(storage).await,
        OrderCommands::Show { order, json } => show(storage, order, json).await,
        OrderCommands::Status { order, status } => set_status(storage, order, status).await,
    }
}

async fn list(storage: &Storage) -> Result<()> {
    let orders = storage.list_orders().await?;

    if orders.is_empty() {
        println!("No orders found.");
        return Ok(());
    }

    println!("Orders:");
    for order in orders {
        println!("  {} [{}] {}", order.id, order.status, order.payload.date);
        println!(
            "    Items: {}, boxes: {}, final amount: {}",
            order.payload.items.len(),
            order.payload.box_count,
            order.payload.final_amount
        );
    }

    Ok(())
}

async fn show(storage: &Storage, order: String, json: bool) -> Result<()> {
    let order = storage.order(&OrderId::new(order)).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&order)?);
        return Ok(());
    }

    let payload = &order.payload;
    println!("Order: {}", order.id);
    println!("  Status: {}", order.status);
    println!("  Date: {}", payload.date);
    println!(
        "  Logistics company: {}",
        payload.logistics_company_id.as_deref().unwrap_or("-")
    );
    println!("  Boxes: {}", payload.box_count);
    println!("  Created: {}", order.created_at);
    println!("  Updated: {}", order.updated_at);

    println!("\nItems ({}):", payload.items.len());
    for (index, item) in payload.items.iter().enumerate() {
        println!(
            "  [{index}] {} ({}) x{} @ {}",
            item.name, item.code, item.quantity, item.unit_cost
        );
        if let Some(packets) = &item.packets {
            let label = match packets.mode {
                PacketMode::Packets => "packet",
                PacketMode::Loose => "loose",
            };
            for (number, composition) in packets.packets.iter().enumerate() {
                let cells: Vec<String> = composition
                    .iter()
                    .map(|e| format!("{}/{}={}", e.color, e.size, e.quantity))
                    .collect();
                println!("    {label} {}: {}", number + 1, cells.join(", "));
            }
        }
        for url in &item.images {
            println!("    image: {url}");
        }
    }

    println!("\nGrand total: {}", payload.grand_total);
    println!("Discount: {}", payload.discount_amount);
    println!("Final amount: {}", payload.final_amount);

    Ok(())
}

async fn set_status(storage: &Storage, order: String, status: OrderStatus) -> Result<()> {
    let id = OrderId::new(order);
    storage.set_status(&id, status).await?;
    println!("✓ Order {id} is now {status}");
    Ok(())
}
