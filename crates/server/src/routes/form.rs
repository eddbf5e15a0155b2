//! `GET /`: the URL entry form.

use axum::response::Html;

const FORM_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8"/>
<meta name="viewport" content="width=device-width,initial-scale=1"/>
<title>View Source</title>
<script src="https://cdn.tailwindcss.com"></script>
</head>
<body class="min-h-screen flex items-center justify-center bg-gray-100">
<form method="get" action="/preview" class="bg-white p-6 rounded shadow-md space-y-4 w-full max-w-md md:max-w-lg lg:max-w-xl">
  <input name="url" type="url" placeholder="Enter URL" required class="w-full rounded-md border border-gray-300 px-3 py-2 text-sm"/>
  <div class="flex items-center justify-between">
    <label class="inline-flex items-center">
      <input type="checkbox" name="reload" value="1" class="h-5 w-5 text-blue-500 bg-gray-100 rounded border border-gray-400 shadow-sm focus:ring-2 focus:ring-blue-500 focus:ring-offset-2 hover:bg-blue-50 checked:bg-blue-500 transition duration-200"/>
      <span class="ml-2 text-sm">Force Reload</span>
    </label>
    <button type="submit" class="rounded-md bg-blue-600 px-4 py-2 text-sm font-medium text-white hover:bg-blue-700">Preview</button>
  </div>
</form>
</body>
</html>"#;

pub async fn form_handler() -> Html<&'static str> {
    Html(FORM_PAGE)
}
