mod telegram;

pub use telegram::TelegramDeliverySink;
