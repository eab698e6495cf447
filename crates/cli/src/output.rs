//! Terminal rendering for command results.
//!
//! Results go to stdout; logs go to stderr through tracing.

#![allow(clippy::print_stdout)]

use std::fmt::Display;

use sealen_client::Notice;
use sealen_client::api::ControlAck;
use sealen_client::services::Receipt;
use sealen_core::pricing::RentalQuote;
use sealen_core::{
    BatteryBand, Booking, BookingTarget, Certificate, CertificationLevel, CertificationModule,
    CertificationProgress, DashboardOverview, Price, Product, Robot, RobotTelemetry, User,
};

pub fn line(text: impl Display) {
    println!("{text}");
}

pub fn notice(notice: &Notice) {
    println!("{notice}");
}

pub fn heading(title: &str) {
    println!();
    println!("{title}");
    println!("{}", "=".repeat(title.chars().count()));
}

pub fn user(user: &User, certification: CertificationLevel) {
    println!("{} <{}>", user.full_name, user.email.as_str());
    println!("  role:          {}", user.role);
    println!(
        "  certified:     {}",
        if user.is_certified { "yes" } else { "no" }
    );
    println!("  certification: {certification}");
}

pub fn products(products: &[Product]) {
    if products.is_empty() {
        println!("No products found");
        return;
    }
    for product in products {
        let stock = if product.in_stock() {
            format!("{} in stock", product.stock_quantity)
        } else {
            "out of stock".to_string()
        };
        println!(
            "#{:<3} {:<28} {:<10} {:>18}  {stock}",
            product.id.to_string(),
            product.name,
            product.category,
            product.unit_price().to_string()
        );
    }
}

pub fn robots(robots: &[Robot]) {
    if robots.is_empty() {
        println!("No robots available");
        return;
    }
    for robot in robots {
        println!(
            "#{:<3} {:<18} {:<12} battery {:>3}%  {}",
            robot.id.to_string(),
            robot.name,
            robot.status.as_str(),
            robot.battery,
            robot.location.as_deref().unwrap_or("-")
        );
    }
}

pub fn quote(quote: &RentalQuote) {
    println!("Rental for {}", quote.days);
    println!("  daily rate: {}", quote.daily_rate);
    println!("  subtotal:   {}", quote.subtotal);
    match quote.tier {
        Some(tier) => println!(
            "  discount:   -{} ({}% off from {} days)",
            quote.discount, tier.percent_off, tier.min_days
        ),
        None => println!("  discount:   none"),
    }
    println!("  total:      {}", quote.total);
}

pub fn receipt(receipt: &Receipt) {
    println!("Booking #{} is {}", receipt.booking.id, receipt.booking.status);
    booking_target(&receipt.booking);
    if let Some(quote) = &receipt.quote {
        self::quote(quote);
    }
    println!(
        "Payment #{} via {}: {} ({})",
        receipt.payment.id,
        receipt.payment.method,
        Price::new(
            receipt.payment.amount,
            receipt.booking.total_price().currency_code
        ),
        receipt.payment.status
    );
    if let Some(transaction) = &receipt.payment.transaction_id {
        println!("  transaction: {transaction}");
    }
}

fn booking_target(booking: &Booking) {
    match booking.target {
        BookingTarget::Rental {
            robot_id,
            duration_days,
        } => println!("  rental of robot #{robot_id} for {duration_days}"),
        BookingTarget::Purchase { product_id } => {
            println!("  purchase of product #{product_id}");
        }
    }
}

pub fn bookings(bookings: &[Booking]) {
    if bookings.is_empty() {
        println!("No bookings yet");
        return;
    }
    for booking in bookings {
        println!(
            "#{:<4} {:<10} {:<9} from {}  {}",
            booking.id.to_string(),
            booking.kind().to_string(),
            booking.status.as_str(),
            booking.start_date.format("%Y-%m-%d"),
            booking.total_price()
        );
    }
}

pub fn modules(modules: &[CertificationModule]) {
    for module in modules {
        let minutes = module
            .duration_minutes
            .map_or_else(String::new, |m| format!(" ({m} min)"));
        println!("{}. {}{minutes}", module.module_number, module.title);
    }
}

pub fn progress(progress: &CertificationProgress) {
    println!(
        "Progress: {} ({}/{} modules)",
        progress.overall_progress, progress.completed_modules, progress.total_modules
    );
    for entry in &progress.modules {
        let mark = if entry.completed { "x" } else { " " };
        println!(
            "  [{mark}] #{} {}",
            entry.module.id, entry.module.title
        );
    }
    if progress.is_certified {
        println!("Certified");
    }
}

pub fn certificate(certificate: &Certificate) {
    println!(
        "Certificate {} ({}) issued {}",
        certificate.cert_number,
        certificate.cert_type,
        certificate.issued_date.format("%Y-%m-%d")
    );
    if let Some(expiry) = certificate.expiry_date {
        println!("  valid until {}", expiry.format("%Y-%m-%d"));
    }
}

pub fn telemetry(telemetry: &RobotTelemetry) {
    let band = match telemetry.battery_band() {
        BatteryBand::Healthy => "",
        BatteryBand::Low => " (low)",
        BatteryBand::Critical => " (critical)",
    };
    println!(
        "Robot #{}: {}{}",
        telemetry.robot_id,
        telemetry.status,
        if telemetry.connected { "" } else { ", disconnected" }
    );
    println!("  battery:  {}%{band}", telemetry.battery);
    println!("  speed:    {:.1}", telemetry.speed);
    let position = &telemetry.position;
    if let (Some(lat), Some(lon)) = (position.latitude, position.longitude) {
        println!("  position: {lat:.5}, {lon:.5}");
    }
    let sensors = &telemetry.sensors;
    if let Some(temperature) = sensors.temperature {
        println!("  water temperature: {temperature:.1} C");
    }
    if let Some(ph) = sensors.ph {
        println!("  pH: {ph:.2}");
    }
}

pub fn ack(ack: &ControlAck) {
    println!("{}", ack.message);
    if let Some(status) = ack.status {
        println!("  status: {status}");
    }
    if let Some(mode) = ack.mode {
        println!("  mode: {mode}");
    }
}

pub fn overview(overview: &DashboardOverview) {
    println!(
        "Robots active: {}/{}",
        overview.robots_active, overview.robots_total
    );
    println!("Area cleaned today:    {:.1} m2", overview.area_cleaned_today);
    println!("Waste collected today: {:.1} kg", overview.waste_collected_today);
    println!("Energy efficiency:     {:.1}%", overview.energy_efficiency);
    println!("Water quality:         {:.1}", overview.water_quality_avg);
    if !overview.recent_activity.is_empty() {
        println!("Recent activity:");
        for entry in &overview.recent_activity {
            println!(
                "  {} {} [{}]",
                entry.time.as_deref().unwrap_or("--:--"),
                entry.activity,
                entry.status
            );
        }
    }
}
