pub mod prescriptions;
