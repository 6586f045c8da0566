#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMove {
    Moved,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindowView {
    pub page_numbers: Vec<usize>,
    pub current_page: usize,
    pub can_prev: bool,
    pub can_next: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    page_size: usize,
    window_size: usize,
    record_count: usize,
    current_page: usize,
    window_start: usize,
    window_end: usize,
}

impl PageWindow {
    pub fn new(page_size: usize, window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            page_size: page_size.max(1),
            window_size,
            record_count: 0,
            current_page: 1,
            window_start: 0,
            window_end: window_size,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn window_bounds(&self) -> (usize, usize) {
        (self.window_start, self.window_end)
    }

    /// Never less than one, even for an empty list.
    pub fn total_pages(&self) -> usize {
        self.page_count().max(1)
    }

    fn page_count(&self) -> usize {
        self.record_count.div_ceil(self.page_size)
    }

    pub fn is_visible(&self, page: usize) -> bool {
        self.window_start < page && page <= self.window_end
    }

    pub fn slice_bounds(&self) -> (usize, usize) {
        ((self.current_page - 1) * self.page_size, self.page_size)
    }

    pub fn view(&self) -> PageWindowView {
        let last_visible = self.window_end.min(self.page_count());
        PageWindowView {
            page_numbers: (self.window_start + 1..=last_visible).collect(),
            current_page: self.current_page,
            can_prev: self.current_page > 1,
            can_next: self.current_page < self.total_pages(),
        }
    }

    /// Follows a change in the number of loaded records. The current page
    /// survives unless it no longer exists, in which case it drops to the
    /// last page and the window re-centers around it.
    pub fn set_record_count(&mut self, record_count: usize) {
        self.record_count = record_count;
        let total = self.total_pages();
        if self.current_page > total {
            self.current_page = total;
        }
        if !self.is_visible(self.current_page) {
            let (start, end) = self.centered_bounds(self.current_page);
            self.window_start = start;
            self.window_end = end;
        }
    }

    pub fn next_page(&mut self) -> PageMove {
        if self.current_page >= self.total_pages() {
            return PageMove::Unchanged;
        }
        self.current_page += 1;
        if self.current_page > self.window_end {
            self.window_start += self.window_size;
            self.window_end += self.window_size;
        }
        PageMove::Moved
    }

    pub fn prev_page(&mut self) -> PageMove {
        if self.current_page <= 1 {
            return PageMove::Unchanged;
        }
        self.current_page -= 1;
        // For a block-aligned window this is exactly `(old - 1) % window_size == 0`;
        // it also brings a re-centered window back over the new page.
        if self.current_page <= self.window_start {
            if self.window_start >= self.window_size {
                self.window_start -= self.window_size;
                self.window_end -= self.window_size;
            } else {
                self.window_start = 0;
                self.window_end = self.window_size;
            }
        }
        PageMove::Moved
    }

    /// Jumps to `target` and re-centers the window on it. Targets outside
    /// `1..=total_pages` are ignored.
    pub fn go_to_page(&mut self, target: usize) -> PageMove {
        if target < 1 || target > self.total_pages() {
            return PageMove::Unchanged;
        }
        let (start, end) = self.centered_bounds(target);
        self.current_page = target;
        self.window_start = start;
        self.window_end = end;
        PageMove::Moved
    }

    pub fn jump_to(&mut self, input: &str) -> PageMove {
        match input.trim().parse::<usize>() {
            Ok(target) => self.go_to_page(target),
            Err(_) => PageMove::Unchanged,
        }
    }

    pub fn select_page(&mut self, page: usize) -> PageMove {
        if page < 1 || page > self.page_count() || !self.is_visible(page) {
            return PageMove::Unchanged;
        }
        self.current_page = page;
        PageMove::Moved
    }

    fn centered_bounds(&self, target: usize) -> (usize, usize) {
        let total = self.total_pages();
        let size = self.window_size;
        if total <= size {
            return (0, total);
        }

        // Half-window of pages before the target; equals `size / 2` for even sizes.
        let left = target as i64 - 1 - (size as i64 - 1) / 2;
        let right = left + size as i64;
        if left <= 1 && target <= size {
            return (0, size);
        }
        if right >= total as i64 {
            return (total - size, total);
        }
        (left as usize, right as usize)
    }
}
