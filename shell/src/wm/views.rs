//! Read-only projections of the registry.

use shared_types::{TaskbarEntry, WindowState};

use super::registry::WindowManager;

/// Pinned apps first, in pinned order, then every other app with a window
/// on the current desktop, in order of first appearance.
pub fn taskbar(manager: &WindowManager) -> Vec<TaskbarEntry> {
    let current = manager.current_desktop();
    let on_desktop: Vec<&WindowState> = manager
        .windows()
        .iter()
        .filter(|w| w.desktop_id == current)
        .collect();

    let mut app_ids: Vec<&str> = manager
        .config()
        .pinned_apps
        .iter()
        .map(String::as_str)
        .collect();
    for window in &on_desktop {
        if !app_ids.contains(&window.app_id.as_str()) {
            app_ids.push(window.app_id.as_str());
        }
    }

    let pinned_count = manager.config().pinned_apps.len();
    app_ids
        .into_iter()
        .enumerate()
        .map(|(index, app_id)| {
            let windows: Vec<&&WindowState> =
                on_desktop.iter().filter(|w| w.app_id == app_id).collect();
            let topmost = windows.iter().max_by_key(|w| w.z_index);
            TaskbarEntry {
                app_id: app_id.to_string(),
                window_id: topmost.map(|w| w.id.clone()),
                pinned: index < pinned_count,
                open: !windows.is_empty(),
                active: windows
                    .iter()
                    .any(|w| manager.active_window() == Some(w.id.as_str())),
                minimized: !windows.is_empty() && windows.iter().all(|w| w.minimized),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::ScreenLayout;
    use shared_types::AppDefinition;

    fn app(id: &str) -> AppDefinition {
        AppDefinition {
            id: id.to_string(),
            name: id.to_string(),
            icon: String::new(),
            default_width: 800,
            default_height: 600,
            external: false,
            exec: None,
        }
    }

    #[test]
    fn test_taskbar_lists_pinned_then_open() {
        let mut wm = WindowManager::new(
            ScreenLayout::default(),
            vec![app("terminal"), app("calculator"), app("explorer")],
        );
        let calc = wm.open_window("calculator", None, None).unwrap();
        let t1 = wm.open_window("terminal", None, None).unwrap();
        let t2 = wm.open_window("terminal", None, None).unwrap();
        wm.focus_window(&t1.id);

        let entries = taskbar(&wm);
        let ids: Vec<_> = entries.iter().map(|e| e.app_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["terminal", "explorer", "blue_software", "settings", "calculator"]
        );

        let terminal = &entries[0];
        assert!(terminal.pinned && terminal.open && terminal.active);
        assert_eq!(terminal.window_id.as_deref(), Some(t1.id.as_str()));
        assert_ne!(terminal.window_id.as_deref(), Some(t2.id.as_str()));

        let calculator = &entries[4];
        assert!(!calculator.pinned);
        assert_eq!(calculator.window_id.as_deref(), Some(calc.id.as_str()));
        assert!(!entries[1].open);
    }

    #[test]
    fn test_taskbar_keeps_minimized_and_hides_other_desktops() {
        let mut wm = WindowManager::new(ScreenLayout::default(), vec![app("calculator")]);
        let calc = wm.open_window("calculator", None, None).unwrap();
        wm.minimize_window(&calc.id);

        let entry = taskbar(&wm).into_iter().find(|e| e.app_id == "calculator").unwrap();
        assert!(entry.minimized);
        assert!(!entry.active);

        wm.switch_desktop(2);
        assert!(taskbar(&wm).iter().all(|e| e.app_id != "calculator"));
    }
}
