pub mod retro;
