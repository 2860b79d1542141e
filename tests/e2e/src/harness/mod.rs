mod db_manager;

pub use db_manager::TestDatabaseManager;
