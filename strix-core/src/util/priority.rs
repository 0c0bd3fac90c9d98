//! Best-effort thread priority boost for the render and audio threads.

/// Raise the calling thread's scheduling priority.
#[cfg(target_os = "linux")]
pub fn raise_current_thread_priority() -> Result<(), String> {
    // Linux keeps nice values per thread, so who=0 targets only the caller.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS as _, 0, -10) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error().to_string());
    }
    Ok(())
}

/// Raise the calling thread's scheduling priority.
///
/// Elsewhere `setpriority` would renice the whole process, so this moves
/// the thread to the top of its current policy instead.
#[cfg(all(unix, not(target_os = "linux")))]
pub fn raise_current_thread_priority() -> Result<(), String> {
    let thread = unsafe { libc::pthread_self() };
    let mut policy: libc::c_int = 0;
    let mut param: libc::sched_param = unsafe { std::mem::zeroed() };

    let rc = unsafe { libc::pthread_getschedparam(thread, &mut policy, &mut param) };
    if rc != 0 {
        return Err(std::io::Error::from_raw_os_error(rc).to_string());
    }
    let max = unsafe { libc::sched_get_priority_max(policy) };
    if max < 0 {
        return Err(std::io::Error::last_os_error().to_string());
    }
    param.sched_priority = max;

    let rc = unsafe { libc::pthread_setschedparam(thread, policy, &param) };
    if rc != 0 {
        return Err(std::io::Error::from_raw_os_error(rc).to_string());
    }
    Ok(())
}

/// Raise the calling thread's scheduling priority.
#[cfg(windows)]
pub fn raise_current_thread_priority() -> Result<(), String> {
    use windows::Win32::System::Threading::{GetCurrentThread, SetThreadPriority, THREAD_PRIORITY_HIGHEST};

    unsafe { SetThreadPriority(GetCurrentThread(), THREAD_PRIORITY_HIGHEST) }.map_err(|e| e.to_string())
}

#[cfg(not(any(unix, windows)))]
pub fn raise_current_thread_priority() -> Result<(), String> {
    Ok(())
}
