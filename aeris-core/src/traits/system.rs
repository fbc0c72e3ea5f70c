//! System control trait

/// Full device restart
pub trait Reboot {
    fn restart(&mut self) -> !;
}
