//! Usage: Lock extension traits that recover from poisoning instead of panicking.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[track_caller]
fn log_poisoned<T>(kind: &'static str) {
    let loc = std::panic::Location::caller();
    tracing::error!(
        lock_kind = kind,
        value_type = std::any::type_name::<T>(),
        file = loc.file(),
        line = loc.line(),
        column = loc.column(),
        "lock poisoned by a panicking thread; recovered the inner value"
    );
}

pub(crate) trait MutexExt<T> {
    fn lock_or_recover(&self) -> MutexGuard<'_, T>;
}

impl<T> MutexExt<T> for Mutex<T> {
    #[track_caller]
    fn lock_or_recover(&self) -> MutexGuard<'_, T> {
        match self.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log_poisoned::<T>("mutex");
                poisoned.into_inner()
            }
        }
    }
}

pub(crate) trait RwLockExt<T> {
    fn read_or_recover(&self) -> RwLockReadGuard<'_, T>;
    fn write_or_recover(&self) -> RwLockWriteGuard<'_, T>;
}

impl<T> RwLockExt<T> for RwLock<T> {
    #[track_caller]
    fn read_or_recover(&self) -> RwLockReadGuard<'_, T> {
        match self.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log_poisoned::<T>("rwlock_read");
                poisoned.into_inner()
            }
        }
    }

    #[track_caller]
    fn write_or_recover(&self) -> RwLockWriteGuard<'_, T> {
        match self.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log_poisoned::<T>("rwlock_write");
                poisoned.into_inner()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn lock_or_recover_after_panic() {
        let mutex = Arc::new(Mutex::new(0));
        let mutex_clone = Arc::clone(&mutex);

        let _ = std::thread::spawn(move || {
            let mut guard = mutex_clone.lock().unwrap();
            *guard = 100;
            panic!("poison the mutex");
        })
        .join();

        let guard = mutex.lock_or_recover();
        assert_eq!(*guard, 100);
    }

    #[test]
    fn rwlock_recovers_for_both_readers_and_writers() {
        let lock = Arc::new(RwLock::new(String::from("before")));
        let lock_clone = Arc::clone(&lock);

        let _ = std::thread::spawn(move || {
            let mut guard = lock_clone.write().unwrap();
            guard.push_str("-written");
            panic!("poison the rwlock");
        })
        .join();

        assert_eq!(lock.read_or_recover().as_str(), "before-written");
        *lock.write_or_recover() = "after".to_string();
        assert_eq!(lock.read_or_recover().as_str(), "after");
    }
}
