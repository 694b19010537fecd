pub mod quarter_ingester;
