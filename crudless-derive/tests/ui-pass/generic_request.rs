//! Generic request types keep their parameters

use crudless::Request;

#[derive(Request)]
#[crudless(result = T, skip_validation)]
struct Echo<T: Send + Sync + 'static> {
    value: T,
}

fn result_of<R: Request>(_: &R) -> &'static str {
    std::any::type_name::<R::Result>()
}

fn main() {
    let echo = Echo { value: 5_u8 };
    assert_eq!(result_of(&echo), "u8");
    assert_eq!(echo.value, 5);
}
