use crate::monitor::MonitorView;
use crate::types::{AddressInfo, AppEvent, Entry};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tab {
    Blocks,
    Address,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Address,
}

#[derive(Clone, Debug, Default)]
pub enum LookupState {
    #[default]
    Idle,
    Loading,
    Done(AddressInfo),
    Failed(String),
}

/// UI-side state: tab/selection/input handling over the monitor's read-only
/// projection. All machine state lives in the monitor task; this struct only
/// mirrors the latest published view.
pub struct App {
    quit: bool,
    tab: Tab,
    input_mode: InputMode,
    sel_entry: usize,
    max_entries: usize,
    address_input: String,
    lookup: LookupState,
    pending_lookup: Option<String>,
    view: MonitorView,
}

impl App {
    pub fn new(max_entries: usize) -> Self {
        Self {
            quit: false,
            tab: Tab::Blocks,
            input_mode: InputMode::Normal,
            sel_entry: 0,
            max_entries,
            address_input: String::new(),
            lookup: LookupState::default(),
            pending_lookup: None,
            view: MonitorView::default(),
        }
    }

    // ----- getters -----
    pub fn quit_flag(&self) -> bool {
        self.quit
    }
    pub fn tab(&self) -> Tab {
        self.tab
    }
    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }
    pub fn view(&self) -> &MonitorView {
        &self.view
    }
    pub fn address_input(&self) -> &str {
        &self.address_input
    }
    pub fn lookup(&self) -> &LookupState {
        &self.lookup
    }
    pub fn sel_entry(&self) -> usize {
        self.sel_entry
    }

    /// Rendered page: the latest snapshot capped to the display limit.
    pub fn visible_entries(&self) -> &[Entry] {
        let n = self.view.entries.len().min(self.max_entries);
        &self.view.entries[..n]
    }

    pub fn selected_entry(&self) -> Option<&Entry> {
        self.visible_entries().get(self.sel_entry)
    }

    pub fn is_new_position(&self, idx: usize) -> bool {
        self.view.new_positions.contains(&idx)
    }

    // ----- events -----
    pub fn quit(&mut self) {
        self.quit = true;
    }

    /// Apply a freshly published projection, keeping the selection in range.
    pub fn on_view(&mut self, view: MonitorView) {
        self.view = view;
        let len = self.visible_entries().len();
        if self.sel_entry >= len {
            self.sel_entry = len.saturating_sub(1);
        }
    }

    pub fn on_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::LookupFinished { address, result } => {
                // A newer submission supersedes this result.
                if address != self.address_input.trim() {
                    return;
                }
                self.lookup = match result {
                    Ok(info) => LookupState::Done(info),
                    Err(msg) => LookupState::Failed(msg),
                };
            }
        }
    }

    // ----- navigation -----
    pub fn next_tab(&mut self) {
        self.tab = match self.tab {
            Tab::Blocks => Tab::Address,
            Tab::Address => Tab::Blocks,
        };
        self.input_mode = InputMode::Normal;
    }

    pub fn up(&mut self) {
        if self.tab == Tab::Blocks && self.sel_entry > 0 {
            self.sel_entry -= 1;
        }
    }

    pub fn down(&mut self) {
        if self.tab == Tab::Blocks && self.sel_entry + 1 < self.visible_entries().len() {
            self.sel_entry += 1;
        }
    }

    // ----- address lookup -----
    pub fn start_address_input(&mut self) {
        if self.tab == Tab::Address {
            self.input_mode = InputMode::Address;
        }
    }

    pub fn cancel_address_input(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn address_add_char(&mut self, c: char) {
        if !c.is_whitespace() {
            self.address_input.push(c);
        }
    }

    pub fn address_backspace(&mut self) {
        self.address_input.pop();
    }

    /// Submit the typed address; the main loop picks it up and spawns the
    /// fetch task.
    pub fn submit_address(&mut self) {
        let address = self.address_input.trim().to_string();
        if address.is_empty() {
            return;
        }
        self.lookup = LookupState::Loading;
        self.pending_lookup = Some(address);
        self.input_mode = InputMode::Normal;
    }

    pub fn take_pending_lookup(&mut self) -> Option<String> {
        self.pending_lookup.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Balance;

    fn entry(height: u64) -> Entry {
        Entry {
            height,
            hash: format!("hash{height}"),
            timestamp: String::new(),
            tx_count: None,
            utxo_created: None,
            utxo_spent: None,
            processing_time_ms: None,
        }
    }

    #[test]
    fn visible_entries_respect_display_cap() {
        let mut app = App::new(2);
        app.on_view(MonitorView {
            entries: vec![entry(3), entry(2), entry(1)],
            ..MonitorView::default()
        });
        assert_eq!(app.visible_entries().len(), 2);
    }

    #[test]
    fn selection_clamps_when_page_shrinks() {
        let mut app = App::new(10);
        app.on_view(MonitorView {
            entries: vec![entry(3), entry(2), entry(1)],
            ..MonitorView::default()
        });
        app.down();
        app.down();
        assert_eq!(app.sel_entry(), 2);

        app.on_view(MonitorView {
            entries: vec![entry(3)],
            ..MonitorView::default()
        });
        assert_eq!(app.sel_entry(), 0);
    }

    #[test]
    fn stale_lookup_result_is_dropped() {
        let mut app = App::new(10);
        app.tab = Tab::Address;
        app.start_address_input();
        for c in "DAddr1".chars() {
            app.address_add_char(c);
        }
        app.submit_address();
        assert_eq!(app.take_pending_lookup().as_deref(), Some("DAddr1"));

        // User re-typed a different address before the reply landed.
        app.address_backspace();
        app.address_add_char('2');

        app.on_event(AppEvent::LookupFinished {
            address: "DAddr1".into(),
            result: Ok(crate::types::AddressInfo {
                address: "DAddr1".into(),
                balance: Balance {
                    available: 1.0,
                    incoming: 0.0,
                    current: 1.0,
                },
                utxos: vec![],
            }),
        });
        assert!(matches!(app.lookup(), LookupState::Loading));
    }
}
