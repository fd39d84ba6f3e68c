use crate::core::mod_manager::ModManager;
use parking_lot::Mutex;
use std::sync::Arc;

pub fn with_manager_mut<F, R>(handle: &Arc<Mutex<ModManager>>, f: F) -> R
where
    F: FnOnce(&mut ModManager) -> R,
{
    let mut guard = handle.lock();
    f(&mut guard)
}

pub fn with_manager<F, R>(handle: &Arc<Mutex<ModManager>>, f: F) -> R
where
    F: FnOnce(&ModManager) -> R,
{
    let guard = handle.lock();
    f(&guard)
}
