use crate::events::EventRepository;
use crate::themes::ThemeRepository;

pub trait Store {
    type Events<'a>: EventRepository
    where
        Self: 'a;
    type Themes<'a>: ThemeRepository
    where
        Self: 'a;

    fn events(&self) -> Self::Events<'_>;
    fn themes(&self) -> Self::Themes<'_>;
}
